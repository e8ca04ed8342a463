//! Runs against a real MySQL server.
//!
//! ```text
//! ROWSET_HOST=localhost ROWSET_USER=app ROWSET_PASSWORD=secret ROWSET_DATABASE=shop \
//!     cargo run --example procedure_call --features mysql
//! ```
//!
//! The procedure is expected to tag its result sets:
//!
//! ```sql
//! CREATE PROCEDURE sp_user_details(IN p_user_id INT)
//! BEGIN
//!     SELECT 'user' AS recordsetName;
//!     SELECT * FROM users WHERE user_id = p_user_id;
//!     SELECT 'languages' AS recordsetName;
//!     SELECT l.* FROM languages l JOIN user_languages ul USING (language_id)
//!         WHERE ul.user_id = p_user_id;
//! END
//! ```

use rowset_core::{ConnectionConfig, Db, FieldMap, MultiFieldMap, Result};

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = ConnectionConfig::new(
        env("ROWSET_HOST", "localhost"),
        env("ROWSET_USER", "root"),
        env("ROWSET_PASSWORD", ""),
        env("ROWSET_DATABASE", "test"),
    );
    let db = Db::mysql(config);

    let mut maps = MultiFieldMap::new();
    maps.insert(
        "user".to_string(),
        FieldMap::from([("id", "user_id"), ("name", "user_name")]),
    );

    match db
        .proc()
        .name("sp_user_details")
        .params(1)
        .execute(Some(&maps))
        .await
    {
        Ok(envelope) => {
            for (name, rows) in &envelope.items {
                println!("{} ({} rows)", name, rows.len());
                for row in rows {
                    println!("  {:?}", row);
                }
            }
        }
        Err(e) if e.is_retryable() => eprintln!("database unreachable: {}", e),
        Err(e) => return Err(e),
    }

    Ok(())
}
