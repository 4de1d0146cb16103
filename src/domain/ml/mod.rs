pub mod example_codec;
pub mod feature_record;
