use async_trait::async_trait;
use mockall::mock;

use pelada_core::models::player::PhoneNumber;

use crate::messenger::{MessagingError, Messenger};

// Mock messaging gateway for testing
mock! {
    pub Messenger {}

    #[async_trait]
    impl Messenger for Messenger {
        async fn send_individual(&self, phone: &PhoneNumber, text: &str) -> Result<(), MessagingError>;

        async fn send_to_group(&self, group_chat_id: &str, text: &str) -> Result<(), MessagingError>;
    }
}
