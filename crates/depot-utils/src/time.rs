/// Parses a duration such as `1d2h30m15s` into milliseconds.
///
/// Units are `s`, `m`, `h` and `d`; every number must carry a unit. Returns `None` for
/// malformed input or when the total overflows.
pub fn parse_duration(input: &str) -> Option<u128> {
    let mut total: u128 = 0;
    let mut number: Option<u128> = None;

    for c in input.chars() {
        if let Some(digit) = c.to_digit(10) {
            let current = number.unwrap_or(0);
            number = Some(current.checked_mul(10)?.checked_add(digit as u128)?);
            continue;
        }

        let multiplier: u128 = match c {
            's' => 1000,
            'm' => 60 * 1000,
            'h' => 60 * 60 * 1000,
            'd' => 24 * 60 * 60 * 1000,
            _ => return None,
        };
        total = total.checked_add(number.take()?.checked_mul(multiplier)?)?;
    }

    if number.is_some() {
        return None;
    }

    Some(total)
}
