use std::fmt::Write as _;

// Bucket sides are `units * 10^(exponent - 1)` for exponents within the `i8` range, so one power below it is needed.
const MIN_EXPONENT: i16 = i8::MIN as i16 - 1;
const MAX_EXPONENT: i16 = i8::MAX as i16;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Bucket geometry is computed from decimal powers of ten. Each power is stored as a pair: the correctly-rounded
    // double for `1eN`, and the remainder `10^N - 1eN` rounded to a double. With both halves, a single fused
    // multiply-add yields the correctly-rounded double for `units * 10^N` across the whole exponent range, which a
    // plain multiplication or division by an inexact power of ten does not.
    let contents = generate_power_of_ten_table();

    let table_file = std::env::var("OUT_DIR").unwrap() + "/tables.rs";
    std::fs::write(table_file, contents).expect("failed to write power-of-ten table");
}

fn power_of_ten(exponent: i16) -> f64 {
    format!("1e{}", exponent)
        .parse::<f64>()
        .expect("power of ten literal should parse")
}

/// Computes `10^exponent - 1e{exponent}` for every exponent in range, as a double.
///
/// Walks outwards from `10^0`, which is exact, carrying the remainder along: each step multiplies or divides the
/// previous power by ten with the rounding error of that step recovered by a fused multiply-add.
fn remainders() -> Vec<f64> {
    let len = (MAX_EXPONENT - MIN_EXPONENT + 1) as usize;
    let index = |exponent: i16| (exponent - MIN_EXPONENT) as usize;
    let mut lo = vec![0.0; len];

    for exponent in 1..=MAX_EXPONENT {
        let prev_hi = power_of_ten(exponent - 1);
        let prev_lo = lo[index(exponent - 1)];
        let product = 10.0 * prev_hi;
        let product_err = 10.0f64.mul_add(prev_hi, -product);
        lo[index(exponent)] = ((product - power_of_ten(exponent)) + product_err) + 10.0 * prev_lo;
    }

    for exponent in (MIN_EXPONENT..0).rev() {
        let hi = power_of_ten(exponent);
        let next_hi = power_of_ten(exponent + 1);
        let next_lo = lo[index(exponent + 1)];
        let product = hi * 10.0;
        let product_err = hi.mul_add(10.0, -product);
        lo[index(exponent)] = (((next_hi - product) - product_err) + next_lo) / 10.0;
    }

    lo
}

fn generate_power_of_ten_table() -> String {
    let len = (MAX_EXPONENT - MIN_EXPONENT + 1) as usize;
    let lo = remainders();

    let mut entries = String::new();
    for (exponent, remainder) in (MIN_EXPONENT..=MAX_EXPONENT).zip(lo) {
        writeln!(entries, "    (1e{}_f64, {:e}_f64),", exponent, remainder).expect("writing to a string cannot fail");
    }

    format!(
        r#"
/// Lowest exponent covered by `POWERS_OF_TEN`.
pub(crate) const MIN_POWER_OF_TEN: i16 = {min};

/// Decimal powers of ten from `1e{min}` to `1e{max}`, indexed by `exponent - ({min})`, each as the nearest double and the
/// remainder left over by it.
pub(crate) static POWERS_OF_TEN: [(f64, f64); {len}] = [
{entries}];
"#,
        min = MIN_EXPONENT,
        max = MAX_EXPONENT,
        len = len,
        entries = entries,
    )
}
