use rowset_core::{
    op, ConnectionConfig, Db, Driver, Envelope, FieldMap, FieldRegistry, QueryBuilder, Result,
};
use serde_json::{json, Value as JsonValue};

/// Prints every statement and answers with canned results
struct EchoDriver;

impl Driver for EchoDriver {
    async fn execute(&self, _config: &ConnectionConfig, sql: &str) -> Result<JsonValue> {
        println!("-> {}", sql);
        let raw = if sql.starts_with("SELECT") {
            json!([{"user_id": 1, "user_name": "John", "email": "john@example.com"}])
        } else if sql.starts_with("CALL") {
            json!([
                [{"recordsetName": "users"}],
                [{"user_id": 1, "user_name": "John"}],
                [{"recordsetName": "languages"}],
                [{"language_id": 4, "language_name": "Polish"}],
                {"affectedRows": 0, "insertId": 0, "info": ""}
            ])
        } else {
            json!({"affectedRows": 1, "insertId": 1, "info": "Rows matched: 1  Changed: 1  Warnings: 0"})
        };
        Ok(raw)
    }
}

fn print(label: &str, envelope: &Envelope) {
    println!(
        "{}: {}\n",
        label,
        serde_json::to_string_pretty(envelope).unwrap_or_default()
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let registry = FieldRegistry::from_json(
        r#"{
            "users": { "fieldsMap": { "id": "user_id", "name": "user_name" } },
            "languages": { "fieldsMap": { "id": "language_id", "name": "language_name" } }
        }"#,
    )?;
    let config = ConnectionConfig::new("localhost", "app", "secret", "shop");
    let db = Db::new(config, EchoDriver).with_registry(registry);

    // Compile without executing
    let sql = db
        .select()
        .from("users")
        .fields(("id", "name"))
        .where_(("name", "John"))
        .order_by("name", true)
        .to_sql(&FieldMap::new())?;
    println!("SELECT SQL: {}\n", sql);

    // Field names go through the registered map both ways
    let envelope = db
        .select()
        .from("users")
        .fields(("id", "name", "email"))
        .where_(("id", op::IN, vec![Some(1), Some(2), Some(2), None]))
        .execute(None)
        .await?;
    print("select", &envelope);

    let envelope = db
        .insert()
        .into("users")
        .set("name", "John")
        .set("email", "john@example.com")
        .set("active", true)
        .execute(None)
        .await?;
    print("insert", &envelope);

    let envelope = db
        .update()
        .from("users")
        .set("email", "john@example.org")
        .where_(("id", 1))
        .execute(None)
        .await?;
    print("update", &envelope);

    let envelope = db
        .delete()
        .from("users")
        .where_(("id", 1))
        .soft()
        .execute(None)
        .await?;
    print("soft delete", &envelope);

    let envelope = db
        .proc()
        .name("sp_user_details")
        .param(1)
        .execute(None)
        .await?;
    print("procedure", &envelope);

    // Validation happens before anything reaches the driver
    if let Err(e) = db.delete().from("users").execute(None).await {
        println!("rejected: {}", e);
    }

    Ok(())
}
