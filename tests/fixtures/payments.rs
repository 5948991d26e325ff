// Payments: unions, discriminators and actix-style routes
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    #[api(validate = "required,len=16,numeric")]
    pub number: String,
}

impl Card {
    pub fn discriminator(&self) -> &'static str {
        "card"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[api(discriminator_value = "bank")]
pub struct BankTransfer {
    #[api(validate = "required,iban")]
    pub iban: String,
    pub bic: String,
}

/// How a charge is paid
pub type PaymentMethod = OneOf2<Card, BankTransfer>;

#[derive(Debug, Deserialize)]
pub struct ChargeRequest {
    #[api(validate = "required,gt=0")]
    pub amount: i64,
    #[api(validate = "required,oneof=usd eur gbp")]
    pub currency: String,
    pub method: PaymentMethod,
    #[api(discriminator = "kind")]
    pub refund_to: Option<PaymentMethod>,
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct Charge {
    pub id: String,
    pub amount: i64,
}

pub fn create_charge(ctx: &Ctx, req: ChargeRequest) -> Result<Charge, ApiError> {
    todo!()
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/charges").route(web::post().to(create_charge)));
}
