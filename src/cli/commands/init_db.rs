//! Init-db command handler

use crate::auth::PasswordHasher;
use crate::config::Config;
use crate::db::Store;
use crate::services::ensure_root_user;

pub async fn cmd_init_db(config: &Config) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    println!("Database ready at {}", config.general.database_path);

    let hasher = PasswordHasher::new(&config.security)?;
    match ensure_root_user(&store, &hasher, config.security.root_password.as_deref()).await? {
        Some(root) => {
            println!("Root user created");
            println!("  username: {}", root.user.username);
            println!("  email:    {}", root.user.email);
            match root.generated_password {
                Some(password) => {
                    println!("  password: {password}");
                    println!();
                    println!("This password is shown once. Change it after logging in.");
                }
                None => println!("  password: (security.root_password)"),
            }
        }
        None => println!("Root user already exists."),
    }

    Ok(())
}
