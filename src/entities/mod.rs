pub mod contract_orders;
pub mod events;
pub mod game_status;
pub mod minigame_runtime;
pub mod minority_questions;
pub mod quiz_questions;
pub mod red_envelope_items;
pub mod script_days;
pub mod users;

pub use contract_orders as contract_order_entity;
pub use events as event_entity;
pub use game_status as game_status_entity;
pub use minigame_runtime as minigame_runtime_entity;
pub use minority_questions as minority_question_entity;
pub use quiz_questions as quiz_question_entity;
pub use red_envelope_items as red_envelope_item_entity;
pub use script_days as script_day_entity;
pub use users as user_entity;

pub use game_status::GAME_STATUS_ID;
pub use minigame_runtime::RUNTIME_KEY;
