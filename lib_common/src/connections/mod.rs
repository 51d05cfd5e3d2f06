pub mod db_postgres;
pub mod queue_redis;
