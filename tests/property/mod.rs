// Property-based tests for the front end and the substitution pass.
//
// Run with more cases (default is 256):
//   PROPTEST_CASES=1000 cargo test --test property

mod front_end_properties;
mod pass_properties;
mod unify_properties;
