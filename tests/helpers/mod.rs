pub mod fake_terraform;
pub mod utilities;
pub mod viya_plan;
