mod params;

pub use params::{parse_parameter_list, ParameterParseError};
