//! AMQP adapter: task publication to a RabbitMQ-compatible broker.

mod publisher;

pub use publisher::AmqpPublisher;
