//! Integration tests for update-cnb-dependency

mod helpers;
mod test_update;
