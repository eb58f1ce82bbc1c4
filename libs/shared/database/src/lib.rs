pub mod supabase;

pub use supabase::{SupabaseClient, SupabaseError, is_unique_violation};
