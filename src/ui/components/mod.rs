mod command_input;
mod customer_form;
mod input;
mod key_result;
mod search_input;

pub use command_input::{CommandEvent, CommandInput};
pub use customer_form::{CustomerForm, FormEvent};
pub use key_result::KeyResult;
pub use search_input::{SearchEvent, SearchInput};
