use crate::error::{WcsError, WcsResult};

#[inline]
pub fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
}

/// Sum of `c[p][q]·u^p·v^q` over a dense, row-major `(order+1)²` table.
pub fn eval_bivariate(coeffs: &[f64], order: usize, u: f64, v: f64) -> f64 {
    let stride = order + 1;
    let rows: Vec<f64> = coeffs
        .chunks_exact(stride)
        .map(|row| horner(row, v))
        .collect();
    horner(&rows, u)
}

/// Solves `f(x, y) = target` by Newton–Raphson with a forward-difference
/// Jacobian.
pub fn newton_raphson_2d<F>(
    target: (f64, f64),
    initial_guess: (f64, f64),
    f: F,
    max_iter: usize,
    tolerance: f64,
) -> WcsResult<(f64, f64)>
where
    F: Fn(f64, f64) -> (f64, f64),
{
    let (tx, ty) = target;
    let (mut x, mut y) = initial_guess;

    for _ in 0..max_iter {
        let (fx, fy) = f(x, y);
        let (rx, ry) = (fx - tx, fy - ty);

        if rx.abs() < tolerance && ry.abs() < tolerance {
            return Ok((x, y));
        }

        let jacobian = jacobian(&f, x, y, (fx, fy));
        let (dx, dy) = solve_2x2(jacobian, (rx, ry))?;
        x -= dx;
        y -= dy;

        if !x.is_finite() || !y.is_finite() {
            return Err(WcsError::convergence_failure("Newton-Raphson step left finite range"));
        }
    }

    Err(WcsError::convergence_failure(format!(
        "Newton-Raphson did not converge in {} iterations",
        max_iter
    )))
}

fn jacobian<F>(f: &F, x: f64, y: f64, at: (f64, f64)) -> [[f64; 2]; 2]
where
    F: Fn(f64, f64) -> (f64, f64),
{
    // step scaled to the magnitude of the coordinate
    let hx = 1e-7 * x.abs().max(1.0);
    let hy = 1e-7 * y.abs().max(1.0);
    let (fx_x, fy_x) = f(x + hx, y);
    let (fx_y, fy_y) = f(x, y + hy);
    [
        [(fx_x - at.0) / hx, (fx_y - at.0) / hy],
        [(fy_x - at.1) / hx, (fy_y - at.1) / hy],
    ]
}

fn solve_2x2(m: [[f64; 2]; 2], b: (f64, f64)) -> WcsResult<(f64, f64)> {
    let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
    if det.abs() < 1e-15 {
        return Err(WcsError::convergence_failure("singular Jacobian"));
    }
    Ok((
        (m[1][1] * b.0 - m[0][1] * b.1) / det,
        (m[0][0] * b.1 - m[1][0] * b.0) / det,
    ))
}
