pub mod cover_cache;
