mod event_create_table;
mod event_invitation_create_table;
mod integration_create_table;
mod schedule_create_table;
mod subscription_create_table;
mod subscription_reminder_create_table;
mod subscription_selector_create_table;
mod unsubscribe_token_create_table;
mod user_create_table;

use sqlx_migrator::vec_box;

pub struct Migration;

sqlx_migrator::sqlite_migration!(
    Migration,
    "soonish",
    "m0_1",
    vec_box![],
    vec_box![
        user_create_table::Operation,
        user_create_table::CreateEmailIdx,
        event_create_table::Operation,
        event_create_table::CreateStartDateIdx,
        event_create_table::CreatePublicStartDateIdx,
        event_create_table::CreateWorkflowIdIdx,
        integration_create_table::Operation,
        integration_create_table::CreateUserNameTagIdx,
        subscription_create_table::Operation,
        subscription_create_table::CreateEventUserIdx,
        subscription_selector_create_table::Operation,
        subscription_reminder_create_table::Operation,
        unsubscribe_token_create_table::Operation,
        unsubscribe_token_create_table::CreateExpiresAtIdx,
        event_invitation_create_table::Operation,
        event_invitation_create_table::CreateTokenIdx,
        schedule_create_table::Operation,
        schedule_create_table::CreateTriggerAtIdx,
    ]
);
