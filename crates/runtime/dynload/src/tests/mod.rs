mod redefinition;
pub mod test_helpers;
