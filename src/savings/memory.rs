use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Currency, NewSaving, SavingResponse, SavingsError, SavingsRepository};
use crate::users::Identity;

/// Process-local savings store seeded with a handful of currencies
#[derive(Debug)]
pub struct InMemorySavingsRepository {
    currencies: HashMap<String, Currency>,
    savings: RwLock<Vec<(Uuid, SavingResponse)>>,
}

fn currency(code: &str, country: &str, name: &str, flag: &str, symbol: &str) -> Currency {
    Currency {
        currency_code: code.to_string(),
        country_name: country.to_string(),
        currency_name: name.to_string(),
        country_flag: flag.to_string(),
        currency_symbol: symbol.to_string(),
    }
}

impl Default for InMemorySavingsRepository {
    fn default() -> Self {
        Self::with_currencies(vec![
            currency("IDR", "Indonesia", "Indonesian Rupiah", "🇮🇩", "Rp"),
            currency("USD", "United States", "US Dollar", "🇺🇸", "$"),
            currency("EUR", "European Union", "Euro", "🇪🇺", "€"),
            currency("JPY", "Japan", "Japanese Yen", "🇯🇵", "¥"),
            currency("SGD", "Singapore", "Singapore Dollar", "🇸🇬", "S$"),
        ])
    }
}

impl InMemorySavingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_currencies(currencies: Vec<Currency>) -> Self {
        Self {
            currencies: currencies
                .into_iter()
                .map(|c| (c.currency_code.clone(), c))
                .collect(),
            savings: RwLock::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SavingsRepository for InMemorySavingsRepository {
    async fn create(&self, saving: NewSaving, owner: &Identity) -> Result<SavingResponse, SavingsError> {
        let currency = self
            .currencies
            .get(&saving.currency_code)
            .ok_or_else(|| SavingsError::UnknownCurrency(saving.currency_code.clone()))?;

        let now = Utc::now();
        let response = SavingResponse {
            uuid: Uuid::new_v4(),
            user: owner.clone(),
            name: saving.name,
            target_amount: saving.target_amount,
            currency_code: saving.currency_code,
            currency_flag: currency.country_flag.clone(),
            image: saving.image,
            filling_plan: saving.filling_plan,
            filling_nominal: saving.filling_nominal,
            created_at: now,
            updated_at: now,
        };

        self.savings.write().await.push((owner.uuid, response.clone()));
        Ok(response)
    }

    async fn list_for_user(&self, owner: &Identity) -> Result<Vec<SavingResponse>, SavingsError> {
        let savings = self.savings.read().await;
        Ok(savings
            .iter()
            .rev()
            .filter(|(user_uuid, _)| *user_uuid == owner.uuid)
            .map(|(_, saving)| SavingResponse {
                user: owner.clone(),
                ..saving.clone()
            })
            .collect())
    }
}
