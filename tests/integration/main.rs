//! Integration tests for the console cache layer.

mod helpers;

mod failure_test;
mod inspection_test;
mod invalidation_test;
mod read_through_test;
