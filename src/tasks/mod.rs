pub mod sensor_task;
pub mod stab_task;
