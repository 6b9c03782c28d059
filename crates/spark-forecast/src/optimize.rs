//! Derivative-free minimization used by the conditional sum of squares fit.

/// Best point found and its objective value.
#[derive(Clone, Debug)]
pub(crate) struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
}

/// Nelder-Mead simplex search.
///
/// Fully deterministic: the initial simplex is `start` plus `step` along each
/// axis and ties are ordered with `total_cmp`.
pub(crate) fn nelder_mead<F>(f: F, start: &[f64], step: f64, max_iter: usize, ftol: f64) -> Minimum
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    simplex.push((start.to_vec(), f(start)));
    for i in 0..n {
        let mut x = start.to_vec();
        x[i] += step;
        let v = f(&x);
        simplex.push((x, v));
    }

    for _ in 0..max_iter {
        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = simplex[0].1;
        let worst = simplex[n].1;
        if (worst - best).abs() <= ftol * (best.abs() + ftol) {
            break;
        }

        let mut centroid = vec![0.0; n];
        for (x, _) in &simplex[..n] {
            for (c, xi) in centroid.iter_mut().zip(x) {
                *c += xi / n as f64;
            }
        }
        let worst_x = simplex[n].0.clone();
        // centroid + coef * (worst - centroid)
        let along = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&worst_x)
                .map(|(c, w)| c + coef * (w - c))
                .collect()
        };

        let xr = along(-1.0);
        let fr = f(&xr);
        if fr < best {
            let xe = along(-2.0);
            let fe = f(&xe);
            simplex[n] = if fe < fr { (xe, fe) } else { (xr, fr) };
            continue;
        }
        if fr < simplex[n - 1].1 {
            simplex[n] = (xr, fr);
            continue;
        }

        let coef = if fr < worst { -0.5 } else { 0.5 };
        let xc = along(coef);
        let fc = f(&xc);
        if fc < fr.min(worst) {
            simplex[n] = (xc, fc);
            continue;
        }

        let best_x = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let x: Vec<f64> = best_x
                .iter()
                .zip(&vertex.0)
                .map(|(b, xi)| b + 0.5 * (xi - b))
                .collect();
            let v = f(&x);
            *vertex = (x, v);
        }
    }

    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (x, value) = simplex.swap_remove(0);
    Minimum { x, value }
}
