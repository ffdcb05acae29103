use crate::application::ApplicationError;
use crate::domain::model::{CustomerId, PlanTemplate, PlanTemplateId};
use crate::domain::port::PlanTemplateRepository;
use std::sync::Arc;

/// 確定した計画の参照
pub struct PlanQueryService {
    template_repository: Arc<dyn PlanTemplateRepository>,
}

impl PlanQueryService {
    pub fn new(template_repository: Arc<dyn PlanTemplateRepository>) -> Self {
        Self {
            template_repository,
        }
    }

    pub async fn get_plan(
        &self,
        template_id: PlanTemplateId,
    ) -> Result<Option<PlanTemplate>, ApplicationError> {
        self.template_repository
            .find_by_id(template_id)
            .await
            .map_err(ApplicationError::from)
    }

    /// 顧客の計画を新しい順で取得
    pub async fn list_customer_plans(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<PlanTemplate>, ApplicationError> {
        self.template_repository
            .find_by_customer(customer_id)
            .await
            .map_err(ApplicationError::from)
    }
}
