use crate::error::JournalResult;
use crate::models::{CreateDailyPlanInput, PlanSaveOutcome};
use crate::repository::PlanStore;

/// Save the plan for `input.date`, updating the existing plan for that date
/// when there is one.
///
/// Uniqueness is only as strong as the lookup: two concurrent saves for a new
/// date can both create.
pub fn save_plan<P: PlanStore + ?Sized>(
    store: &P,
    input: CreateDailyPlanInput,
) -> JournalResult<PlanSaveOutcome> {
    match store.get_plan_by_date(input.date)? {
        Some(existing) => {
            log::info!("Plan for {} exists ({}), updating", input.date, existing.id);
            store.update_plan(&existing.id, input).map(PlanSaveOutcome::Updated)
        }
        None => store.create_plan(input).map(PlanSaveOutcome::Created),
    }
}
