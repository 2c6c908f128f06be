//! Память вместо базы для тестов сценариев. Повторяет контракт порта
//! один в один, включая искусственную «недоступность».

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Storage, StorageError, StorageResult};
use crate::models::{Car, Invitation, Member, NewCar, NewInvitation, NewMember};

#[derive(Default)]
struct Tables {
    members: Vec<Member>,
    cars: Vec<Car>,
    invitations: Vec<Invitation>,
    next_member_id: i64,
    next_car_id: i64,
}

#[derive(Default)]
pub struct MemStorage {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Имитация лежащей базы
    pub fn set_unavailable(&self, value: bool) {
        self.unavailable.store(value, Ordering::SeqCst);
    }

    fn gate(&self) -> StorageResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }

    pub async fn members(&self) -> Vec<Member> {
        self.tables.read().await.members.clone()
    }

    pub async fn cars(&self) -> Vec<Car> {
        self.tables.read().await.cars.clone()
    }

    pub async fn invitations(&self) -> Vec<Invitation> {
        self.tables.read().await.invitations.clone()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn get_member_by_tg_id(&self, tg_id: i64) -> StorageResult<Option<Member>> {
        self.gate()?;
        Ok(self
            .tables
            .read()
            .await
            .members
            .iter()
            .find(|m| m.tg_id == tg_id)
            .cloned())
    }

    async fn get_member_by_username(&self, username: &str) -> StorageResult<Option<Member>> {
        self.gate()?;
        let needle = username.to_lowercase();
        Ok(self
            .tables
            .read()
            .await
            .members
            .iter()
            .find(|m| {
                m.username
                    .as_ref()
                    .map(|u| u.to_lowercase() == needle)
                    .unwrap_or(false)
            })
            .cloned())
    }

    async fn create_member(&self, member: NewMember) -> StorageResult<Member> {
        self.gate()?;
        let mut tables = self.tables.write().await;
        tables.next_member_id += 1;
        let created = Member {
            id: tables.next_member_id,
            tg_id: member.tg_id,
            username: member.username,
            first_name: member.first_name,
            last_name: member.last_name,
            birth_date: member.birth_date,
            city: member.city,
            country: member.country,
            phone: member.phone,
            about: member.about,
            photo: member.photo,
            status: member.status,
            created_at: Utc::now(),
        };
        tables.members.push(created.clone());
        Ok(created)
    }

    async fn update_member(&self, member: &Member) -> StorageResult<()> {
        self.gate()?;
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.members.iter_mut().find(|m| m.id == member.id) {
            *existing = member.clone();
        }
        Ok(())
    }

    async fn get_car(&self, id: i64) -> StorageResult<Option<Car>> {
        self.gate()?;
        Ok(self.tables.read().await.cars.iter().find(|c| c.id == id).cloned())
    }

    async fn get_cars_by_member(&self, member_id: i64) -> StorageResult<Vec<Car>> {
        self.gate()?;
        Ok(self
            .tables
            .read()
            .await
            .cars
            .iter()
            .filter(|c| c.owner_id == Some(member_id))
            .cloned()
            .collect())
    }

    async fn get_cars_by_plate(&self, plate: &str) -> StorageResult<Vec<Car>> {
        self.gate()?;
        Ok(self
            .tables
            .read()
            .await
            .cars
            .iter()
            .filter(|c| c.plate == plate)
            .cloned()
            .collect())
    }

    async fn create_car(&self, car: NewCar) -> StorageResult<Car> {
        self.gate()?;
        let mut tables = self.tables.write().await;
        tables.next_car_id += 1;
        let created = Car {
            id: tables.next_car_id,
            owner_id: car.owner_id,
            brand: car.brand,
            model: car.model,
            year: car.year,
            color: car.color,
            plate: car.plate,
            photos: car.photos,
            status: car.status,
            created_at: Utc::now(),
        };
        tables.cars.push(created.clone());
        Ok(created)
    }

    async fn update_car(&self, car: &Car) -> StorageResult<()> {
        self.gate()?;
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.cars.iter_mut().find(|c| c.id == car.id) {
            *existing = car.clone();
        }
        Ok(())
    }

    async fn create_invitation(&self, invitation: NewInvitation) -> StorageResult<Invitation> {
        self.gate()?;
        let mut tables = self.tables.write().await;
        let created = Invitation {
            id: Uuid::new_v4().to_string(),
            car_id: invitation.car_id,
            plate: invitation.plate,
            created_by: invitation.created_by,
            comment: invitation.comment,
            photos: invitation.photos,
            status: invitation.status,
            joined_car_id: None,
            created_at: Utc::now(),
        };
        tables.invitations.push(created.clone());
        Ok(created)
    }

    async fn update_invitation(&self, invitation: &Invitation) -> StorageResult<()> {
        self.gate()?;
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .invitations
            .iter_mut()
            .find(|i| i.id == invitation.id)
        {
            *existing = invitation.clone();
        }
        Ok(())
    }

    async fn get_invitations_by_car(&self, car_id: i64) -> StorageResult<Vec<Invitation>> {
        self.gate()?;
        Ok(self
            .tables
            .read()
            .await
            .invitations
            .iter()
            .filter(|i| i.car_id == car_id)
            .cloned()
            .collect())
    }

    async fn get_invitations_by_plate(&self, plate: &str) -> StorageResult<Vec<Invitation>> {
        self.gate()?;
        Ok(self
            .tables
            .read()
            .await
            .invitations
            .iter()
            .filter(|i| i.plate == plate)
            .cloned()
            .collect())
    }
}
