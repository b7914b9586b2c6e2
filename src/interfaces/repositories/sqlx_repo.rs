use sqlx::PgPool;

#[derive(Clone)]
pub struct SqlxUserRepo {
    pub pool: PgPool,
}

#[derive(Clone)]
pub struct SqlxEventRepo {
    pub pool: PgPool,
}

#[derive(Clone)]
pub struct SqlxInvitationRepo {
    pub pool: PgPool,
}

#[derive(Clone)]
pub struct SqlxDeletionLedger {
    pub pool: PgPool,
}
