pub mod twelvedata;
pub mod util;
