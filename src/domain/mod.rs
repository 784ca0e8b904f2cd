pub mod new_subscription;
pub mod pagination;
pub mod subscriber_email;
pub mod subscription;
pub mod subscription_status;
