//! Unit tests module

#[allow(dead_code)]
mod common {
    include!("../common/mod.rs");
}

mod diagnose_test;
mod enumerator_test;
mod events_test;
