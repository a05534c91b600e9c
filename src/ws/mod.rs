pub mod connctx;
pub mod faults;
pub mod roomctx;
