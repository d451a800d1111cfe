pub mod posting;
pub mod term_dict;
pub mod inverted;
