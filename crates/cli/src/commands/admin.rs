//! Staff account management.
//!
//! ```bash
//! stride-cli admin create -e owner@stride.shoes -n "Store Owner" -r super_admin
//! stride-cli admin promote -e asha@stride.shoes -r admin
//! ```

use rand::Rng;
use rand::distr::Alphanumeric;

use stride_core::{Email, UserId, UserRole};
use stride_server::db::UserRepository;
use stride_server::services::auth::AuthService;

use super::{CommandError, connect};

const GENERATED_PASSWORD_LENGTH: usize = 20;

fn parse_staff_role(role: &str) -> Result<UserRole, CommandError> {
    role.parse::<UserRole>()
        .ok()
        .filter(|r| r.is_staff())
        .ok_or_else(|| CommandError::InvalidRole(role.to_owned()))
}

fn generate_password() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_PASSWORD_LENGTH)
        .map(char::from)
        .collect()
}

/// Create a staff account. Without `password` a random one is generated and
/// printed once.
pub async fn create_user(
    email: &str,
    name: &str,
    role: &str,
    password: Option<String>,
) -> Result<UserId, CommandError> {
    let role = parse_staff_role(role)?;
    let pool = connect().await?;

    let generated = password.is_none();
    let password = password.unwrap_or_else(generate_password);

    let user = AuthService::new(&pool)
        .create_account(email, name, None, role, &password)
        .await?;

    tracing::info!(
        "Staff account created. ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    if generated {
        #[allow(clippy::print_stdout)]
        {
            println!("Generated password (shown once): {password}");
        }
    }
    Ok(user.id)
}

/// Give an existing account a staff role.
pub async fn promote(email: &str, role: &str) -> Result<(), CommandError> {
    let role = parse_staff_role(role)?;
    let email_address =
        Email::parse(email).map_err(|_| CommandError::UnknownUser(email.to_owned()))?;
    let pool = connect().await?;

    let users = UserRepository::new(&pool);
    let user = users
        .get_by_email(&email_address)
        .await?
        .ok_or_else(|| CommandError::UnknownUser(email.to_owned()))?;
    let updated = users.set_role(user.id, role).await?;

    tracing::info!("{} is now {}", updated.email, updated.role);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_roles_only() {
        assert_eq!(parse_staff_role("admin").unwrap(), UserRole::Admin);
        assert_eq!(parse_staff_role("super_admin").unwrap(), UserRole::SuperAdmin);
        assert!(parse_staff_role("customer").is_err());
        assert!(parse_staff_role("owner").is_err());
    }

    #[test]
    fn test_generated_password_shape() {
        let password = generate_password();
        assert_eq!(password.len(), GENERATED_PASSWORD_LENGTH);
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(password, generate_password());
    }
}
