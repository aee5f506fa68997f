use crate::shared::ParamPage;

// state local to the tui that changes how keys resolve;
// synced from DisplayState once per loop
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    pub param_page: ParamPage,
}
