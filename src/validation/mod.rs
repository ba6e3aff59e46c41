pub mod forms;

pub use forms::NewUserForm;
