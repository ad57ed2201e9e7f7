//! Account email templates.

/// A rendered email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub subject: String,
    pub body: String,
}

/// Welcome message sent after signup.
pub fn welcome(name: &str, profile_url: &str) -> Email {
    Email {
        subject: "Welcome to LinkUp".to_string(),
        body: format!(
            "Hi {},\n\nWelcome to LinkUp! Your account is ready. \
             Complete your profile to start connecting: {}\n\nThe LinkUp team",
            name, profile_url
        ),
    }
}

/// Password reset link.
pub fn password_reset(reset_url: &str) -> Email {
    Email {
        subject: "Reset your LinkUp password".to_string(),
        body: format!(
            "We received a request to reset your password.\n\n\
             Open this link within one hour to choose a new one: {}\n\n\
             If you did not ask for this, you can ignore this email.",
            reset_url
        ),
    }
}

/// Confirmation after a successful reset.
pub fn password_reset_success() -> Email {
    Email {
        subject: "Your LinkUp password was changed".to_string(),
        body: "Your password has been reset successfully. \
               If this was not you, contact support immediately."
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_email_carries_link() {
        let email = password_reset("https://app.example/reset-password/abc");
        assert!(email.body.contains("https://app.example/reset-password/abc"));
        assert!(welcome("Ada", "https://app.example/profile/ada").body.contains("Ada"));
    }
}
