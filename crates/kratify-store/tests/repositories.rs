use kratify_store::{
    AddressChanges, AddressRepository, NewAddress, NewUser, StoreError, UserChanges,
    UserRepository,
};
use tokio_postgres::NoTls;

const SCHEMA: &str = "
CREATE TEMP TABLE users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user',
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    refresh_token TEXT,
    token_expiry TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ,
    deleted_at TIMESTAMPTZ,
    created_by UUID,
    updated_by UUID,
    deleted_by UUID
);
CREATE TEMP TABLE addresses (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL,
    label TEXT NOT NULL,
    recipient_name TEXT NOT NULL,
    phone TEXT NOT NULL,
    province TEXT NOT NULL,
    city TEXT NOT NULL,
    district TEXT NOT NULL,
    sub_district TEXT NOT NULL,
    postal_code TEXT NOT NULL,
    full_address TEXT NOT NULL,
    is_primary BOOLEAN NOT NULL DEFAULT FALSE,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ,
    deleted_at TIMESTAMPTZ,
    created_by UUID,
    updated_by UUID,
    deleted_by UUID
);
";

fn address(label: &str, is_primary: bool) -> NewAddress {
    NewAddress {
        label: label.into(),
        recipient_name: "Ada".into(),
        phone: "0812".into(),
        province: "Jawa Barat".into(),
        city: "Bandung".into(),
        district: "Coblong".into(),
        sub_district: "Dago".into(),
        postal_code: "40135".into(),
        full_address: "Jl. Dago 1".into(),
        is_primary,
    }
}

#[tokio::test]
async fn user_and_address_lifecycle() -> Result<(), StoreError> {
    dotenvy::dotenv().ok();
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(v) => v,
        Err(_) => {
            eprintln!("DATABASE_URL is not set; skipping user_and_address_lifecycle");
            return Ok(());
        }
    };

    let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
        .await
        .map_err(kratify_db::DbError::from)?;
    tokio::spawn(async move {
        let _ = connection.await;
    });
    client
        .batch_execute(SCHEMA)
        .await
        .map_err(kratify_db::DbError::from)?;

    let users = UserRepository::new(&client);
    let addresses = AddressRepository::new(&client);

    let ada = users
        .create(
            NewUser {
                email: "ada@example.com".into(),
                password: "hash".into(),
                name: "Ada".into(),
                role: None,
            },
            None,
        )
        .await?;

    let dup = users
        .create(
            NewUser {
                email: "ada@example.com".into(),
                password: "hash".into(),
                name: "Other".into(),
                role: None,
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(dup, StoreError::DuplicateEmail));

    let found = users.find_by_email("ada@example.com").await?;
    assert_eq!(found.id, ada);
    assert_eq!(found.role, "user");

    let renamed = users
        .update(
            ada,
            UserChanges {
                name: Some("Ada L.".into()),
                ..Default::default()
            },
            Some(ada),
        )
        .await?;
    assert_eq!(renamed.name, "Ada L.");
    assert_eq!(renamed.updated_by, Some(ada));

    let home = addresses.create(ada, address("Home", true), Some(ada)).await?;
    assert!(home.is_primary);
    assert_eq!(home.created_by, Some(ada));

    let cleared = addresses.clear_primary(ada, Some(ada)).await?;
    assert_eq!(cleared, 1);
    let office = addresses.create(ada, address("Office", true), Some(ada)).await?;

    let listed = addresses.find_by_user(ada).await?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, office.id);

    let stranger = uuid::Uuid::new_v4();
    let err = addresses
        .update(
            stranger,
            home.id,
            AddressChanges {
                city: Some("Jakarta".into()),
                ..Default::default()
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    addresses.delete(ada, home.id, Some(ada)).await?;
    assert!(addresses.find_by_id(home.id).await.unwrap_err().is_not_found());

    users.delete(ada, None).await?;
    assert!(users.find_by_id(ada).await.unwrap_err().is_not_found());
    assert!(users.delete(ada, None).await.unwrap_err().is_not_found());

    users.purge(ada).await?;
    let page = users.list(1, 10).await?;
    assert_eq!(page.total, 0);
    Ok(())
}
