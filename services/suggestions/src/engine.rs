//! The strategy registry driver (spec §4.J): gathers parameters once,
//! iterates every registered strategy against every facility in a
//! company, and returns a flat list.

use carbonledger_core::entities::{Company, Facility};
use carbonledger_core::error::AppResult;
use carbonledger_storage::repositories::activity::SuggestionParameterRepository;

use crate::strategy::{Parameters, SuggestionOutcome, SuggestionStrategy};

pub struct SuggestionEngine {
    strategies: Vec<Box<dyn SuggestionStrategy>>,
    parameters: SuggestionParameterRepository,
}

impl SuggestionEngine {
    pub fn new(parameters: SuggestionParameterRepository) -> Self {
        Self {
            strategies: Vec::new(),
            parameters,
        }
    }

    pub fn register(&mut self, strategy: Box<dyn SuggestionStrategy>) -> &mut Self {
        self.strategies.push(strategy);
        self
    }

    async fn load_parameters(&self) -> AppResult<Parameters> {
        let rows = self.parameters.list_all().await?;
        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }

    /// Run every applicable strategy against every facility, returning a
    /// flat list of outcomes (actionable suggestions and info fallbacks
    /// interleaved, in registration order per facility).
    pub async fn generate_for_company(
        &self,
        company: &Company,
        facilities: &[Facility],
    ) -> AppResult<Vec<SuggestionOutcome>> {
        let params = self.load_parameters().await?;
        let mut outcomes = Vec::new();

        for facility in facilities {
            for strategy in &self.strategies {
                if !strategy.is_applicable(company, facility, &params) {
                    continue;
                }
                let mut generated = strategy.generate(company, facility, &params).await?;
                outcomes.append(&mut generated);
            }
        }

        Ok(outcomes)
    }
}
