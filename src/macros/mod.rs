#[macro_use]
pub(crate) mod feature_cfg;

#[macro_use]
pub mod generate_fn_macro;
