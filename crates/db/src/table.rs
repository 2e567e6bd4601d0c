use sea_query::Iden;

#[derive(Iden, Clone)]
pub enum User {
    Table,
    Id,
    Email,
    DisplayName,
    PasswordHash,
    IsVerified,
    CreatedAt,
}

#[derive(Iden, Clone)]
pub enum Event {
    Table,
    Id,
    Name,
    Description,
    StartDate,
    EndDate,
    Timezone,
    Location,
    IsPublic,
    OrganizerUserId,
    WorkflowId,
    IsCancelled,
    CreatedAt,
}

#[derive(Iden, Clone)]
pub enum Integration {
    Table,
    Id,
    UserId,
    Name,
    Tag,
    IsActive,
    #[iden = "type"]
    Type,
    DeliveryUrl,
    Config,
    CreatedAt,
}

#[derive(Iden, Clone)]
pub enum Subscription {
    Table,
    Id,
    EventId,
    UserId,
    CreatedAt,
}

#[derive(Iden, Clone)]
pub enum SubscriptionSelector {
    Table,
    Id,
    SubscriptionId,
    IntegrationId,
    Tag,
}

#[derive(Iden, Clone)]
pub enum SubscriptionReminder {
    Table,
    Id,
    SubscriptionId,
    OffsetSeconds,
}

#[derive(Iden, Clone)]
pub enum UnsubscribeToken {
    Table,
    Token,
    SubscriptionId,
    CreatedAt,
    UsedAt,
    ExpiresAt,
}

/// C1's durable timer store: one row per pending or fired schedule,
/// polled by the scheduler's sweep job.
#[derive(Iden, Clone)]
pub enum Schedule {
    Table,
    Id,
    TriggerAt,
    Payload,
    FiredAt,
    CreatedAt,
}

#[derive(Iden, Clone)]
pub enum EventInvitation {
    Table,
    Id,
    Token,
    EventId,
    Email,
    InvitedByUserId,
    CreatedAt,
    UsedAt,
    ExpiresAt,
}
