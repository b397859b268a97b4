pub mod twilio;

use async_trait::async_trait;

/// Outbound WhatsApp delivery.
#[async_trait]
pub trait MessagingProvider: Send + Sync {
    /// `to` may be a bare number or a `whatsapp:` address.
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()>;
}

/// Normalizes a number to Twilio's `whatsapp:+...` address form.
pub fn whatsapp_address(number: &str) -> String {
    let number = number.trim();
    if number.starts_with("whatsapp:") {
        number.to_string()
    } else {
        format!("whatsapp:{number}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whatsapp_address() {
        assert_eq!(whatsapp_address("+96899999999"), "whatsapp:+96899999999");
        assert_eq!(whatsapp_address("whatsapp:+1555"), "whatsapp:+1555");
        assert_eq!(whatsapp_address(" 99999999 "), "whatsapp:99999999");
    }
}
