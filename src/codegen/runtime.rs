/// Support code placed at the top of every translation unit.
///
/// `py_str` mirrors Python's `str()` for the value kinds the compiler
/// produces and backs both `print` and string concatenation. The arithmetic
/// helpers follow Python's rounding toward negative infinity.
pub const PRELUDE: &str = r#"#include <bits/stdc++.h>
using namespace std;

string render_list(const vector<long long>& values) {
    string out = "[";
    for (size_t i = 0; i < values.size(); i++) {
        if (i > 0) {
            out += ", ";
        }
        out += to_string(values[i]);
    }
    return out + "]";
}

string py_str(const string& s) { return s; }
string py_str(const char* s) { return string(s); }
string py_str(char c) { return string(1, c); }
string py_str(bool b) { return b ? "True" : "False"; }
string py_str(int n) { return to_string(n); }
string py_str(long n) { return to_string(n); }
string py_str(long long n) { return to_string(n); }
string py_str(double x) {
    if (std::isnan(x)) {
        return "nan";
    }
    if (std::isinf(x)) {
        return x > 0 ? "inf" : "-inf";
    }
    ostringstream out;
    out << setprecision(15) << x;
    string s = out.str();
    if (s.find_first_of(".e") == string::npos) {
        s += ".0";
    }
    return s;
}
string py_str(const vector<long long>& values) { return render_list(values); }

long long py_floordiv(long long a, long long b) {
    if (b == 0) {
        throw domain_error("integer division or modulo by zero");
    }
    long long q = a / b;
    if (a % b != 0 && (a < 0) != (b < 0)) {
        q -= 1;
    }
    return q;
}

long long py_mod(long long a, long long b) {
    if (b == 0) {
        throw domain_error("integer division or modulo by zero");
    }
    long long r = a % b;
    if (r != 0 && (r < 0) != (b < 0)) {
        r += b;
    }
    return r;
}

double py_fmod(double a, double b) {
    double r = fmod(a, b);
    if (r != 0 && (r < 0) != (b < 0)) {
        r += b;
    }
    return r;
}

bool py_truthy(const string& s) { return !s.empty(); }
bool py_truthy(const vector<long long>& values) { return !values.empty(); }

vector<long long> py_concat(const vector<long long>& a, const vector<long long>& b) {
    vector<long long> out = a;
    out.insert(out.end(), b.begin(), b.end());
    return out;
}

vector<long long> py_repeat(const vector<long long>& values, long long n) {
    vector<long long> out;
    for (long long i = 0; i < n; i++) {
        out.insert(out.end(), values.begin(), values.end());
    }
    return out;
}

string py_repeat(const string& s, long long n) {
    string out;
    for (long long i = 0; i < n; i++) {
        out += s;
    }
    return out;
}

template <typename Seq>
decltype(auto) py_index(Seq&& seq, long long i) {
    long long n = static_cast<long long>(seq.size());
    if (i < 0) {
        i += n;
    }
    if (i < 0 || i >= n) {
        throw out_of_range("index out of range");
    }
    return seq[i];
}

long long py_step(long long step) {
    if (step == 0) {
        throw invalid_argument("range() arg 3 must not be zero");
    }
    return step;
}

template <typename T>
T& py_lvalue(T&& value) {
    return value;
}

vector<long long> py_range(long long start, long long stop, long long step) {
    py_step(step);
    vector<long long> out;
    for (long long i = start; step > 0 ? i < stop : i > stop; i += step) {
        out.push_back(i);
    }
    return out;
}
"#;
