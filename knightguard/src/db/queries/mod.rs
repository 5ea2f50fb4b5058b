pub mod saved_entries;
