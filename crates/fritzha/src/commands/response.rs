//! Offline challenge-response calculator.

use secrecy::SecretString;

use fritzha_api::challenge_response;

use crate::cli::ResponseArgs;
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ResponseArgs) -> Result<(), CliError> {
    if args.challenge.trim().is_empty() {
        return Err(CliError::Validation {
            field: "challenge".into(),
            reason: "must not be empty".into(),
        });
    }
    let secret = SecretString::from(args.password.clone());
    output::print_output(&challenge_response(args.challenge.trim(), &secret));
    Ok(())
}
