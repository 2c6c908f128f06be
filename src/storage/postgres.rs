use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use uuid::Uuid;

use super::{Storage, StorageError, StorageResult};
use crate::models::{
    Car, CarStatus, Invitation, InvitationStatus, Member, MemberStatus, NewCar, NewInvitation,
    NewMember,
};

#[derive(Clone, Debug)]
pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Database { pool })
    }

    pub async fn init(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        // Таблица участников
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS members (
                id BIGSERIAL PRIMARY KEY,
                tg_id BIGINT NOT NULL UNIQUE,
                username TEXT,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                birth_date DATE,
                city TEXT,
                country TEXT,
                phone TEXT,
                about TEXT,
                photo TEXT,
                status TEXT NOT NULL DEFAULT 'no_vehicle',
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Таблица автомобилей, включая записи-приглашения без владельца
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cars (
                id BIGSERIAL PRIMARY KEY,
                owner_id BIGINT REFERENCES members(id),
                brand TEXT,
                model TEXT,
                year INTEGER,
                color TEXT,
                plate TEXT NOT NULL,
                photos JSONB NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'active',
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Таблица приглашений
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS invitations (
                id TEXT PRIMARY KEY,
                car_id BIGINT NOT NULL REFERENCES cars(id),
                plate TEXT NOT NULL,
                created_by BIGINT NOT NULL,
                comment TEXT,
                photos JSONB NOT NULL DEFAULT '[]',
                status TEXT NOT NULL DEFAULT 'new',
                joined_car_id BIGINT,
                created_at TIMESTAMP WITH TIME ZONE DEFAULT NOW(),
                updated_at TIMESTAMP WITH TIME ZONE DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_members_tg_id ON members (tg_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_members_username ON members (username)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cars_owner_id ON cars (owner_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_cars_plate ON cars (plate)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_invitations_car_id ON invitations (car_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_invitations_plate ON invitations (plate)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn member_from_row(row: &PgRow) -> StorageResult<Member> {
    let status: String = row.get("status");
    Ok(Member {
        id: row.get("id"),
        tg_id: row.get("tg_id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        birth_date: row.get("birth_date"),
        city: row.get("city"),
        country: row.get("country"),
        phone: row.get("phone"),
        about: row.get("about"),
        photo: row.get("photo"),
        status: MemberStatus::parse(&status)
            .ok_or_else(|| StorageError::Unavailable(format!("bad member status: {}", status)))?,
        created_at: row.get("created_at"),
    })
}

fn car_from_row(row: &PgRow) -> StorageResult<Car> {
    let status: String = row.get("status");
    let photos: serde_json::Value = row.get("photos");
    Ok(Car {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        brand: row.get("brand"),
        model: row.get("model"),
        year: row.get("year"),
        color: row.get("color"),
        plate: row.get("plate"),
        photos: serde_json::from_value(photos)?,
        status: CarStatus::parse(&status)
            .ok_or_else(|| StorageError::Unavailable(format!("bad car status: {}", status)))?,
        created_at: row.get("created_at"),
    })
}

fn invitation_from_row(row: &PgRow) -> StorageResult<Invitation> {
    let status: String = row.get("status");
    let photos: serde_json::Value = row.get("photos");
    Ok(Invitation {
        id: row.get("id"),
        car_id: row.get("car_id"),
        plate: row.get("plate"),
        created_by: row.get("created_by"),
        comment: row.get("comment"),
        photos: serde_json::from_value(photos)?,
        status: InvitationStatus::parse(&status).ok_or_else(|| {
            StorageError::Unavailable(format!("bad invitation status: {}", status))
        })?,
        joined_car_id: row.get("joined_car_id"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl Storage for Database {
    async fn get_member_by_tg_id(&self, tg_id: i64) -> StorageResult<Option<Member>> {
        let row = sqlx::query("SELECT * FROM members WHERE tg_id = $1")
            .bind(tg_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(member_from_row).transpose()
    }

    async fn get_member_by_username(&self, username: &str) -> StorageResult<Option<Member>> {
        let row = sqlx::query("SELECT * FROM members WHERE LOWER(username) = LOWER($1)")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(member_from_row).transpose()
    }

    async fn create_member(&self, member: NewMember) -> StorageResult<Member> {
        let row = sqlx::query(
            r#"
            INSERT INTO members
            (tg_id, username, first_name, last_name, birth_date, city, country, phone, about, photo, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(member.tg_id)
        .bind(&member.username)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(member.birth_date)
        .bind(&member.city)
        .bind(&member.country)
        .bind(&member.phone)
        .bind(&member.about)
        .bind(&member.photo)
        .bind(member.status.as_str())
        .fetch_one(&self.pool)
        .await?;
        member_from_row(&row)
    }

    async fn update_member(&self, member: &Member) -> StorageResult<()> {
        sqlx::query(
            r#"
            UPDATE members SET
                username = $2, first_name = $3, last_name = $4, birth_date = $5,
                city = $6, country = $7, phone = $8, about = $9, photo = $10,
                status = $11, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(member.id)
        .bind(&member.username)
        .bind(&member.first_name)
        .bind(&member.last_name)
        .bind(member.birth_date)
        .bind(&member.city)
        .bind(&member.country)
        .bind(&member.phone)
        .bind(&member.about)
        .bind(&member.photo)
        .bind(member.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_car(&self, id: i64) -> StorageResult<Option<Car>> {
        let row = sqlx::query("SELECT * FROM cars WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(car_from_row).transpose()
    }

    async fn get_cars_by_member(&self, member_id: i64) -> StorageResult<Vec<Car>> {
        let rows = sqlx::query("SELECT * FROM cars WHERE owner_id = $1 ORDER BY id")
            .bind(member_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(car_from_row).collect()
    }

    async fn get_cars_by_plate(&self, plate: &str) -> StorageResult<Vec<Car>> {
        let rows = sqlx::query("SELECT * FROM cars WHERE plate = $1 ORDER BY id")
            .bind(plate)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(car_from_row).collect()
    }

    async fn create_car(&self, car: NewCar) -> StorageResult<Car> {
        let row = sqlx::query(
            r#"
            INSERT INTO cars (owner_id, brand, model, year, color, plate, photos, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(car.owner_id)
        .bind(&car.brand)
        .bind(&car.model)
        .bind(car.year)
        .bind(&car.color)
        .bind(&car.plate)
        .bind(serde_json::to_value(&car.photos)?)
        .bind(car.status.as_str())
        .fetch_one(&self.pool)
        .await?;
        car_from_row(&row)
    }

    async fn update_car(&self, car: &Car) -> StorageResult<()> {
        sqlx::query(
            r#"
            UPDATE cars SET
                owner_id = $2, brand = $3, model = $4, year = $5, color = $6,
                plate = $7, photos = $8, status = $9, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(car.id)
        .bind(car.owner_id)
        .bind(&car.brand)
        .bind(&car.model)
        .bind(car.year)
        .bind(&car.color)
        .bind(&car.plate)
        .bind(serde_json::to_value(&car.photos)?)
        .bind(car.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_invitation(&self, invitation: NewInvitation) -> StorageResult<Invitation> {
        let id = Uuid::new_v4().to_string();
        let row = sqlx::query(
            r#"
            INSERT INTO invitations (id, car_id, plate, created_by, comment, photos, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(invitation.car_id)
        .bind(&invitation.plate)
        .bind(invitation.created_by)
        .bind(&invitation.comment)
        .bind(serde_json::to_value(&invitation.photos)?)
        .bind(invitation.status.as_str())
        .fetch_one(&self.pool)
        .await?;
        invitation_from_row(&row)
    }

    async fn update_invitation(&self, invitation: &Invitation) -> StorageResult<()> {
        sqlx::query(
            r#"
            UPDATE invitations SET
                comment = $2, photos = $3, status = $4, joined_car_id = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(&invitation.id)
        .bind(&invitation.comment)
        .bind(serde_json::to_value(&invitation.photos)?)
        .bind(invitation.status.as_str())
        .bind(invitation.joined_car_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_invitations_by_car(&self, car_id: i64) -> StorageResult<Vec<Invitation>> {
        let rows = sqlx::query("SELECT * FROM invitations WHERE car_id = $1 ORDER BY created_at")
            .bind(car_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(invitation_from_row).collect()
    }

    async fn get_invitations_by_plate(&self, plate: &str) -> StorageResult<Vec<Invitation>> {
        let rows = sqlx::query("SELECT * FROM invitations WHERE plate = $1 ORDER BY created_at")
            .bind(plate)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(invitation_from_row).collect()
    }
}
