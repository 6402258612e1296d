pub mod action;
pub mod observation;
pub mod step_info;
pub mod transition;
