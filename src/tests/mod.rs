pub mod support;

mod interaction_cache_tests;
