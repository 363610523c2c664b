mod customer_list;
mod generations;

pub use customer_list::{draw_confirm_delete, draw_customer_list};
pub use generations::draw_generations;
