use indoc::indoc;
use sluice_core::{Adapter, Config, Driver, Persistence};
use tokio::runtime::Handle;

pub async fn simple<D: Driver>(driver: D, config: &Config) {
    let executor = Handle::current();
    let adapter = Adapter::new(driver)
        .init(config.clone(), &executor)
        .await
        .expect("Could not initialize the adapter");

    adapter
        .update("DROP TABLE IF EXISTS simple_item", &executor)
        .await
        .expect("Failed to drop simple_item");
    adapter
        .update(
            indoc! {"
                CREATE TABLE simple_item (
                    id INTEGER PRIMARY KEY,
                    name VARCHAR(64) NOT NULL,
                    price DOUBLE PRECISION,
                    note VARCHAR(64)
                )
            "},
            &executor,
        )
        .await
        .expect("Failed to create simple_item");

    let outcome = adapter
        .update(
            "INSERT INTO simple_item (id, name, price) VALUES (1, 'first', 1.5)",
            &executor,
        )
        .await
        .expect("Failed to insert the first item");
    assert_eq!(outcome.rows_affected, 1);
    assert_eq!(outcome.keys, ["1"]);

    let outcome = adapter
        .update(
            indoc! {"
                INSERT INTO simple_item (id, name, price, note) VALUES
                    (3, 'third', 30.0, 'last'),
                    (2, 'second', NULL, NULL)
            "},
            &executor,
        )
        .await
        .expect("Failed to insert the other items");
    assert_eq!(outcome.rows_affected, 2);

    let result = adapter
        .query(
            "SELECT id, name, price, note FROM simple_item ORDER BY id DESC",
            &executor,
        )
        .await
        .expect("Failed to select the items");
    assert_eq!(result.columns(), ["id", "name", "price", "note"]);
    assert_eq!(result.len(), 3);
    let ids = result
        .iter()
        .map(|row| row.get::<i64>("id").expect("id must be an integer"))
        .collect::<Vec<_>>();
    assert_eq!(ids, [3, 2, 1]);
    for row in &result {
        assert_eq!(row.names(), result.columns());
    }
    assert_eq!(result[0].get::<String>("name").unwrap(), "third");
    assert_eq!(result[0].get::<Option<String>>("note").unwrap().as_deref(), Some("last"));
    assert_eq!(result[1].get::<Option<f64>>("price").unwrap(), None);
    assert_eq!(result[2].get::<f64>("price").unwrap(), 1.5);

    let outcome = adapter
        .update("UPDATE simple_item SET note = 'seen'", &executor)
        .await
        .expect("Failed to update the items");
    assert_eq!(outcome.rows_affected, 3);
    assert!(outcome.keys.is_empty());

    let result = adapter
        .query("SELECT id FROM simple_item WHERE id > 100", &executor)
        .await
        .expect("Failed to run an empty select");
    assert!(result.is_empty());

    let outcome = adapter
        .update("DELETE FROM simple_item WHERE id >= 2", &executor)
        .await
        .expect("Failed to delete the items");
    assert_eq!(outcome.rows_affected, 2);

    adapter
        .update("DROP TABLE simple_item", &executor)
        .await
        .expect("Failed to drop simple_item");
    adapter
        .close(&executor)
        .await
        .expect("Could not close the adapter");
}
