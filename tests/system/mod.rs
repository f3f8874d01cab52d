pub mod sub_task;
