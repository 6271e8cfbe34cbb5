//! Deterministic processor fleet standing in for real downstream gateways
//! (§4.10). Outcomes are keyed on `card_last_four` so the HTTP surface and
//! integration tests can reproduce any scenario from spec.md §8 without a
//! network call, matching §6.2's note that "deterministic test overrides
//! ... are a property of individual processor implementations."

use fallback_engine_core::{DeclineType, Processor, ProcessorResult, ProcessorStatus, TransactionRequest};
use futures::future::BoxFuture;
use std::time::Duration;

/// Reserved `card_last_four` values that force a specific outcome,
/// regardless of which processor is charged. Any other value succeeds.
fn scripted_status(card_last_four: &str) -> ProcessorStatus {
    match card_last_four {
        "0000" => ProcessorStatus::HardDecline,
        "0001" => ProcessorStatus::SoftDecline,
        "0002" => ProcessorStatus::RateLimited,
        "0003" => ProcessorStatus::Timeout,
        _ => ProcessorStatus::Success,
    }
}

macro_rules! scripted_processor {
    ($name:ident, $label:expr, $fee_rate:expr) => {
        pub struct $name;

        impl Processor for $name {
            fn name(&self) -> &str {
                $label
            }

            fn fee_rate(&self) -> f64 {
                $fee_rate
            }

            fn charge(&self, request: &TransactionRequest) -> BoxFuture<'static, ProcessorResult> {
                let amount = request.amount;
                let fee_rate = $fee_rate;
                let status = scripted_status(&request.card_last_four);
                Box::pin(async move {
                    match status {
                        ProcessorStatus::Success => {
                            tokio::time::sleep(Duration::from_millis(15)).await;
                            ProcessorResult::success($label, amount, fee_rate, 15)
                        }
                        ProcessorStatus::HardDecline => {
                            ProcessorResult::decline(
                                $label,
                                ProcessorStatus::HardDecline,
                                DeclineType::Hard,
                                "stolen_card",
                                amount,
                                10,
                            )
                        }
                        ProcessorStatus::SoftDecline => {
                            ProcessorResult::decline(
                                $label,
                                ProcessorStatus::SoftDecline,
                                DeclineType::Soft,
                                "insufficient_funds",
                                amount,
                                10,
                            )
                        }
                        ProcessorStatus::RateLimited => {
                            ProcessorResult::decline(
                                $label,
                                ProcessorStatus::RateLimited,
                                DeclineType::RateLimit,
                                "rate_limited",
                                amount,
                                10,
                            )
                        }
                        ProcessorStatus::Timeout => {
                            // Sleeps past any sane PROCESSOR_TIMEOUT_SECONDS so the
                            // engine's own deadline fires and synthesizes TIMEOUT.
                            tokio::time::sleep(Duration::from_secs(30)).await;
                            ProcessorResult::timeout($label, amount, 30_000)
                        }
                        ProcessorStatus::CircuitOpen => unreachable!(),
                    }
                })
            }
        }
    };
}

scripted_processor!(VortexPay, "VortexPay", 0.025);
scripted_processor!(SwiftPay, "SwiftPay", 0.029);
scripted_processor!(PixFlow, "PixFlow", 0.032);

#[cfg(test)]
mod tests {
    use super::*;
    use fallback_engine_core::Currency;
    use std::collections::HashMap;

    fn request(card_last_four: &str) -> TransactionRequest {
        TransactionRequest {
            transaction_id: "tx-test".to_string(),
            amount: fallback_engine_core::Decimal2::from_cents(10_000),
            currency: Currency::USD,
            merchant_id: "merchant-1".to_string(),
            card_last_four: card_last_four.to_string(),
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn default_card_succeeds() {
        let result = VortexPay.charge(&request("4242")).await;
        assert_eq!(result.status, ProcessorStatus::Success);
        assert_eq!(result.fee, Some(fallback_engine_core::Decimal2::from_cents(250)));
    }

    #[tokio::test]
    async fn reserved_card_forces_hard_decline() {
        let result = SwiftPay.charge(&request("0000")).await;
        assert_eq!(result.status, ProcessorStatus::HardDecline);
        assert_eq!(result.decline_type, Some(DeclineType::Hard));
    }

    #[tokio::test]
    async fn reserved_card_forces_rate_limited() {
        let result = PixFlow.charge(&request("0002")).await;
        assert_eq!(result.status, ProcessorStatus::RateLimited);
    }
}
