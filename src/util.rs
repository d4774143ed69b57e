pub mod audio;
pub mod task_pool;
