use log::debug;

use crate::error::{WcsError, WcsResult};
use crate::header::{KeywordProvider, WcsKeyword};

use super::polynomial::{eval_bivariate, newton_raphson_2d};
use super::Distortion;

pub const MAX_SIP_ORDER: u32 = 9;

const INVERSE_MAX_ITER: usize = 50;
const INVERSE_TOLERANCE: f64 = 1e-10;

/// One SIP polynomial: coefficients `c[p][q]` of `u^p·v^q` for `p + q ≤ order`.
#[derive(Debug, Clone, PartialEq)]
pub struct SipPolynomial {
    order: u32,
    coeffs: Vec<f64>,
}

impl SipPolynomial {
    pub fn new(order: u32) -> WcsResult<Self> {
        if order > MAX_SIP_ORDER {
            return Err(WcsError::invalid_parameter(format!(
                "SIP order {} exceeds {}",
                order, MAX_SIP_ORDER
            )));
        }
        let stride = order as usize + 1;
        Ok(Self {
            order,
            coeffs: vec![0.0; stride * stride],
        })
    }

    #[inline]
    pub fn order(&self) -> u32 {
        self.order
    }

    fn index(&self, p: u32, q: u32) -> Option<usize> {
        p.checked_add(q)
            .filter(|degree| *degree <= self.order)
            .map(|_| (p * (self.order + 1) + q) as usize)
    }

    pub fn set(&mut self, p: u32, q: u32, value: f64) -> WcsResult<()> {
        let index = self.index(p, q).ok_or_else(|| {
            WcsError::invalid_parameter(format!(
                "SIP term ({}, {}) exceeds order {}",
                p, q, self.order
            ))
        })?;
        self.coeffs[index] = value;
        Ok(())
    }

    pub fn with(mut self, p: u32, q: u32, value: f64) -> WcsResult<Self> {
        self.set(p, q, value)?;
        Ok(self)
    }

    pub fn get(&self, p: u32, q: u32) -> f64 {
        self.index(p, q).map_or(0.0, |i| self.coeffs[i])
    }

    #[inline]
    pub fn eval(&self, u: f64, v: f64) -> f64 {
        eval_bivariate(&self.coeffs, self.order as usize, u, v)
    }

    /// Non-zero terms as `(p, q, coefficient)`.
    pub fn terms(&self) -> impl Iterator<Item = (u32, u32, f64)> + '_ {
        (0..=self.order).flat_map(move |p| {
            (0..=self.order - p).filter_map(move |q| {
                let c = self.get(p, q);
                (c != 0.0).then_some((p, q, c))
            })
        })
    }

    fn from_header(header: &impl KeywordProvider, name: &str) -> WcsResult<Option<Self>> {
        let order_key = format!("{}_ORDER", name);
        let Some(order) = header.get_number(&order_key) else {
            return Ok(None);
        };
        if order < 0.0 || order.fract() != 0.0 || order > MAX_SIP_ORDER as f64 {
            return Err(WcsError::invalid_keyword(
                order_key,
                format!("order must be an integer in 0..={}", MAX_SIP_ORDER),
            ));
        }

        let mut poly = Self::new(order as u32)?;
        for p in 0..=poly.order {
            for q in 0..=poly.order - p {
                if let Some(value) = header.get_number(&format!("{}_{}_{}", name, p, q)) {
                    poly.set(p, q, value)?;
                }
            }
        }
        Ok(Some(poly))
    }

    fn keywords(&self, name: &str) -> Vec<WcsKeyword> {
        let mut keywords = vec![WcsKeyword::integer(
            format!("{}_ORDER", name),
            self.order as i64,
        )];
        keywords.extend(
            self.terms()
                .map(|(p, q, c)| WcsKeyword::real(format!("{}_{}_{}", name, p, q), c)),
        );
        keywords
    }
}

/// Simple Imaging Polynomial distortion. Polynomials are evaluated in pixel
/// offsets from `CRPIX`.
#[derive(Debug, Clone, PartialEq)]
pub struct SipDistortion {
    crpix: [f64; 2],
    a: SipPolynomial,
    b: SipPolynomial,
    inverse: Option<(SipPolynomial, SipPolynomial)>,
}

impl SipDistortion {
    pub fn new(crpix: [f64; 2], a: SipPolynomial, b: SipPolynomial) -> Self {
        Self {
            crpix,
            a,
            b,
            inverse: None,
        }
    }

    pub fn with_inverse(mut self, ap: SipPolynomial, bp: SipPolynomial) -> Self {
        self.inverse = Some((ap, bp));
        self
    }

    /// Reads `A_ORDER`/`B_ORDER` and friends. Returns `None` when the header
    /// carries no `A_ORDER`.
    pub fn from_header(header: &impl KeywordProvider, crpix: [f64; 2]) -> WcsResult<Option<Self>> {
        let Some(a) = SipPolynomial::from_header(header, "A")? else {
            if header.contains("B_ORDER") {
                return Err(WcsError::invalid_keyword("A_ORDER", "B_ORDER given without A_ORDER"));
            }
            return Ok(None);
        };
        let b = SipPolynomial::from_header(header, "B")?
            .ok_or_else(|| WcsError::invalid_keyword("B_ORDER", "A_ORDER given without B_ORDER"))?;

        let mut sip = Self::new(crpix, a, b);
        match (
            SipPolynomial::from_header(header, "AP")?,
            SipPolynomial::from_header(header, "BP")?,
        ) {
            (Some(ap), Some(bp)) => sip = sip.with_inverse(ap, bp),
            (None, None) => debug!("SIP without AP/BP; inverse will be iterative"),
            _ => {
                return Err(WcsError::invalid_keyword(
                    "AP_ORDER/BP_ORDER",
                    "inverse SIP needs both AP and BP",
                ))
            }
        }
        debug!(
            "SIP distortion: A order {}, B order {}, inverse {}",
            sip.a.order(),
            sip.b.order(),
            sip.has_inverse()
        );
        Ok(Some(sip))
    }

    #[inline]
    pub fn crpix(&self) -> [f64; 2] {
        self.crpix
    }

    pub fn a(&self) -> &SipPolynomial {
        &self.a
    }

    pub fn b(&self) -> &SipPolynomial {
        &self.b
    }

    pub fn has_inverse(&self) -> bool {
        self.inverse.is_some()
    }

    pub fn pix2foc(&self, x: f64, y: f64) -> (f64, f64) {
        let (dx, dy) = self.offset(x, y);
        (x + dx, y + dy)
    }

    /// Inverse of [`pix2foc`](Self::pix2foc): the AP/BP polynomials when
    /// present, otherwise Newton–Raphson on A/B.
    pub fn foc2pix(&self, x: f64, y: f64) -> WcsResult<(f64, f64)> {
        match &self.inverse {
            Some((ap, bp)) => {
                let u = x - self.crpix[0];
                let v = y - self.crpix[1];
                Ok((x + ap.eval(u, v), y + bp.eval(u, v)))
            }
            None => newton_raphson_2d(
                (x, y),
                (x, y),
                |px, py| self.pix2foc(px, py),
                INVERSE_MAX_ITER,
                INVERSE_TOLERANCE,
            )
            .map_err(|e| WcsError::convergence_failure(format!("SIP inverse: {}", e))),
        }
    }

    pub fn to_keywords(&self) -> Vec<WcsKeyword> {
        let mut keywords = self.a.keywords("A");
        keywords.extend(self.b.keywords("B"));
        if let Some((ap, bp)) = &self.inverse {
            keywords.extend(ap.keywords("AP"));
            keywords.extend(bp.keywords("BP"));
        }
        keywords
    }
}

impl Distortion for SipDistortion {
    fn offset(&self, x: f64, y: f64) -> (f64, f64) {
        let u = x - self.crpix[0];
        let v = y - self.crpix[1];
        (self.a.eval(u, v), self.b.eval(u, v))
    }
}
