use crate::{
    correlation::CallbackState,
    gateway::{
        InitiatedPayment,
        payin::PaymentResponse,
        status::{PaymentStatusDetails, StatusResponse},
    },
};

impl TryFrom<(PaymentResponse, CallbackState)> for InitiatedPayment {
    type Error = url::ParseError;

    fn try_from((value, state): (PaymentResponse, CallbackState)) -> Result<Self, Self::Error> {
        let payment = value.payment;
        let redirect_url = url::Url::parse(&payment.authentication.redirect_url)?;
        Ok(Self {
            payment_id: payment.id,
            ref_id: payment.initiation.ref_id,
            redirect_url,
            state,
            status: payment.status,
        })
    }
}

impl From<StatusResponse> for PaymentStatusDetails {
    fn from(value: StatusResponse) -> Self {
        let payment = value.payment;
        Self {
            status: payment.status,
            status_reason_information: payment.status_reason_information,
            currency: payment.initiation.amount.currency,
            value: payment.initiation.amount.value,
            ref_id: payment.initiation.ref_id,
        }
    }
}
